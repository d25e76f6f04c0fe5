pub mod support;

#[cfg(test)]
mod workflow;
