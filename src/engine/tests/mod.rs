mod helpers;
mod tests_basic;
mod tests_scans;
mod tests_state;
