pub mod logging;
pub mod routing;
