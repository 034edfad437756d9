pub mod dictionary;
pub mod jobs;
pub mod movies;
pub mod sounds;

pub use dictionary::{DictionaryEntry, DictionarySpider};
pub use jobs::{JobPosting, JobSpider};
pub use movies::{LinkRule, MovieLink, MovieLinkSpider};
pub use sounds::{SoundLink, SoundTrackSpider};
