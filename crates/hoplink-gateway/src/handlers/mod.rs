mod analytics;
mod health;
mod links;
mod redirect;

pub use analytics::{dashboard_handler, top_urls_handler, url_stats_handler};
pub use health::health_handler;
pub use links::{delete_url_handler, get_url_handler, list_user_urls_handler, shorten_handler};
pub use redirect::resolve_handler;
