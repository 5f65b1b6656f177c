pub mod repository_base;
