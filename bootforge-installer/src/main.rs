fn main() -> anyhow::Result<()> {
    bootforge_installer::run()
}
