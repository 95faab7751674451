pub mod support;

mod semantic;
