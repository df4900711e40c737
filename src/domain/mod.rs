mod account;
mod budget;
mod category;
mod money;
mod period;
mod savings_goal;
mod settings;
mod template;
mod transaction;

pub use account::*;
pub use budget::*;
pub use category::*;
pub use money::*;
pub use period::*;
pub use savings_goal::*;
pub use settings::*;
pub use template::*;
pub use transaction::*;
