mod modes;
mod population;
mod run;

pub use run::run;
