/**
 * Logging and panic reporting for the binary.
 */
pub mod process;
/**
 * The ~/.tinyhost directory and its config file.
 */
pub mod state;
