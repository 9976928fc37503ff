//! Output generation.
//!
//! - [`rss`]: renders the retained-new articles as an RSS 2.0 document
//!
//! The rendered bytes are handed back to the pipeline, which owns when and
//! where they are written.

pub mod rss;
