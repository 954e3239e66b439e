pub mod challenge;
pub mod gift;
pub mod submission;
pub mod track;
pub mod webhook;
