mod argument_parsing;
mod commands;
