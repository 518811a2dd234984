pub mod http;

#[cfg(feature = "browser")]
pub mod browser;

pub use http::{HttpElement, HttpSession, HttpSessionFactory};

#[cfg(feature = "browser")]
pub use browser::{BrowserElement, BrowserOptions, BrowserSession, BrowserSessionFactory};
