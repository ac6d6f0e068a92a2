fn main() -> anyhow::Result<()> {
    editflow::cli::run()
}
