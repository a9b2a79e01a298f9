pub mod spoonacular;

pub use spoonacular::SpoonacularAdapter;
