mod executor_heap;
mod fees;
mod logging;
