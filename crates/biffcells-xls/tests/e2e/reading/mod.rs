mod cells;
mod formulas;
mod substreams;
