fn main() -> anyhow::Result<()> {
    reviewcheck_cli::run()
}
