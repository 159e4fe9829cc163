mod forgot_password;
mod reset_password;
mod util;

use forgot_password::*;
use reset_password::*;
pub use util::*;
