//! One module per subcommand.  Each exposes an `execute` function called
//! from `main`.

pub mod completions;
pub mod open;
pub mod recover;
pub mod status;
pub mod version;
