mod tests_full;
