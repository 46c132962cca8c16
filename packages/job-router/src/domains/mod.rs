// Business domains
pub mod companies;
pub mod jobs;
pub mod matching;
pub mod providers;
pub mod routings;
pub mod technicians;
pub mod use_cases;
