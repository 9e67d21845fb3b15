pub mod polygonize;
pub mod run;
