fn main() -> anyhow::Result<()> {
    casedesk_cli::run()
}
