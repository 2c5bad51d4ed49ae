
// Command sets for the oscilloscopes the recorder knows how to drive. Only the Rigol DS1000E series for now;
// another family would get its own module here.

pub mod ds1000e;
