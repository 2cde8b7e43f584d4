use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    a2ui_term::cli::main()
}
