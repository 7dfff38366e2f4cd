use anyhow::Result;
use b3stocks_lib::universe::Universe;

use crate::output::{print_universe, OutputFormat};

pub fn run(universe: &Universe, format: &OutputFormat) -> Result<()> {
    print_universe(universe, format)
}
