//! 浏览器连接
//!
//! 两种方式获得页面：连接已打开调试端口的浏览器，或自行启动无头浏览器

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;
