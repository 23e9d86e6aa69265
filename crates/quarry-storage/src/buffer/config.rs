//! Buffer pool configuration.

use quarry_common::constants::{DEFAULT_POOL_INSTANCES, DEFAULT_POOL_SIZE, MIN_POOL_SIZE};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames per pool instance.
    pub pool_size: usize,
    /// Number of independent pool instances (shards).
    pub num_instances: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the given per-instance pool size
    /// and the default number of instances.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            num_instances: DEFAULT_POOL_INSTANCES,
        }
    }

    /// Sets the number of pool instances.
    pub fn with_instances(mut self, num_instances: usize) -> Self {
        self.num_instances = num_instances;
        self
    }

    /// Sets the per-instance pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Total number of frames across all instances.
    pub fn total_frames(&self) -> usize {
        self.pool_size * self.num_instances
    }

    /// Total memory used for page data across all instances.
    pub fn memory_usage(&self) -> usize {
        self.total_frames() * quarry_common::constants::PAGE_SIZE
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size < MIN_POOL_SIZE {
            return Err("pool_size must be > 0");
        }
        if self.num_instances == 0 {
            return Err("num_instances must be > 0");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_common::constants::PAGE_SIZE;

    #[test]
    fn test_config_new() {
        let config = BufferPoolConfig::new(100);
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.num_instances, DEFAULT_POOL_INSTANCES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BufferPoolConfig::new(10).with_instances(8).with_pool_size(16);
        assert_eq!(config.pool_size, 16);
        assert_eq!(config.num_instances, 8);
        assert_eq!(config.total_frames(), 128);
        assert_eq!(config.memory_usage(), 128 * PAGE_SIZE);
    }

    #[test]
    fn test_validation() {
        assert!(BufferPoolConfig::new(0).validate().is_err());
        assert!(BufferPoolConfig::new(8).with_instances(0).validate().is_err());
        assert!(BufferPoolConfig::default().validate().is_ok());
    }
}
