mod debt;
mod entry;
mod method;
mod transfer;

pub use debt::{Debt, DebtType};
pub use entry::{Entry, EntryType};
pub use method::Method;
pub use transfer::Transfer;

#[cfg(test)]
mod tests;
