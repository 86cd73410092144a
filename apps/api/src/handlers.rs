pub mod disclosure_requests;
pub mod fields;
pub mod health;
pub mod permissions;

#[cfg(test)]
mod tests;
