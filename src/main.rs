fn main() -> anyhow::Result<()> {
    meeting_pacer_lib::run()
}
