use anyhow::Result;

fn main() -> Result<()> {
    fct_cli::main_entry()
}
