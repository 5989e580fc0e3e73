use std::collections::BTreeMap;

use tally_core::Bill;

/// Copies each present source field to its canonical destination. Source
/// fields are left in place.
pub fn apply_field_mapping(bill: &mut Bill, mapping: &BTreeMap<String, String>) {
    for (src, dst) in mapping {
        if let Some(value) = bill.field(src).map(str::to_owned) {
            bill.set_field(dst, value);
        }
    }
}
