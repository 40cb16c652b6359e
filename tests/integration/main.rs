mod logging;
mod middleware;
mod submission;
