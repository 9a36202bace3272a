//! The `mockexam list-areas` command.

use anyhow::Result;

use mockexam_core::model::{ContentArea, ITEMS_PER_AREA};

pub fn execute() -> Result<()> {
    for area in ContentArea::ALL {
        println!("{:<18} {}", area.to_string(), area.label());
    }
    println!("\nEach listed area adds {ITEMS_PER_AREA} items. Repeat an area for a longer batch.");
    Ok(())
}
