#![forbid(unsafe_code)]

pub mod anthropic;
pub mod assets;
pub mod check;
pub mod cli;
pub mod config;
pub mod convert;
pub mod dates;
pub mod formats;
pub mod generate;
pub mod http;
pub mod improve;
pub mod logging;
pub mod migrate;
pub mod openai;
pub mod output;
pub mod retry;
pub mod richtext;
pub mod slug;
pub mod storyblok;
pub mod validate;
pub mod wordpress;

#[cfg(test)]
pub(crate) mod testing;
