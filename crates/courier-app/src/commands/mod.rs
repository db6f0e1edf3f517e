pub mod lookup;
pub mod reference;
pub mod run;
pub mod scan;
