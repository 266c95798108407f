pub mod collection;
pub mod top_k;
pub mod vector;
