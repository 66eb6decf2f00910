pub mod ordered;
