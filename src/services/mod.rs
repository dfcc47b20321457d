pub mod extractor;
pub mod history;
pub mod likes;
pub mod page;
pub mod recommender;
pub mod refresher;
pub mod similarity;
pub mod tracking;

pub use likes::{HttpLikeClient, LikeClient};
pub use recommender::{Recommender, RecommenderSettings, RecommenderState};
pub use refresher::{spawn_refresh_loop, RefreshHandle};
pub use tracking::{InteractionTracker, Trigger};
