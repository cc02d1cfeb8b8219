mod helpers;
mod test_clear;
mod test_config;
mod test_stage0;
mod test_stage3;
