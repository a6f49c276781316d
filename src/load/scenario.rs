//! Load scenario description: who logs in, what they call, how often

use rand::Rng;
use reqwest::Method;
use std::time::Duration;

use crate::client::{ClientConfig, Credentials};
use crate::errors::{HarnessError, Result};

/// One weighted call a simulated user may pick
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTask {
    /// Name results are aggregated under
    pub name: String,
    pub method: Method,
    pub path: String,
    pub weight: u32,
}

impl LoadTask {
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            weight,
        }
    }

    /// Parse `[NAME=]METHOD:PATH[*WEIGHT]`, e.g. `info=GET:/user/info*3`
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, rest) = match spec.split_once('=') {
            Some((name, rest)) => (Some(name.trim().to_string()), rest),
            None => (None, spec),
        };
        let (call, weight) = match rest.rsplit_once('*') {
            Some((call, weight)) => {
                let weight = weight
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| HarnessError::InvalidArgument(format!("Invalid task weight in '{}'", spec)))?;
                (call, weight)
            }
            None => (rest, 1),
        };
        let (method, path) = call
            .split_once(':')
            .ok_or_else(|| HarnessError::InvalidArgument(format!("Task '{}' must look like METHOD:PATH", spec)))?;
        let method = method
            .trim()
            .to_ascii_uppercase()
            .parse::<Method>()
            .map_err(|_| HarnessError::InvalidArgument(format!("Invalid method in task '{}'", spec)))?;
        let path = path.trim().to_string();
        let name = name.unwrap_or_else(|| format!("{} {}", method, path));

        Ok(Self::new(name, method, path, weight))
    }
}

pub fn default_tasks() -> Vec<LoadTask> {
    vec![
        LoadTask::new("user info", Method::GET, "/user/info", 3),
        LoadTask::new("user list", Method::GET, "/user/list", 1),
    ]
}

/// Shared, read-only description of a load run
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub base_url: String,
    /// Concurrent simulated users
    pub users: u32,
    /// Task picks per user after login
    pub iterations: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub credentials: Credentials,
    pub login_path: String,
    pub tasks: Vec<LoadTask>,
    /// Per call
    pub timeout: Duration,
    /// Delay between starting consecutive users
    pub spawn_interval: Duration,
}

impl LoadConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            users: 10,
            iterations: 20,
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(3),
            credentials: Credentials::new("001", "admin", "Lx123456"),
            login_path: "/user/login".to_string(),
            tasks: default_tasks(),
            timeout: Duration::from_secs(30),
            spawn_interval: Duration::ZERO,
        }
    }

    /// Target, credentials, login path and timeout taken from a client config
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            credentials: config.credentials.clone(),
            login_path: config.login.login_endpoint().to_string(),
            timeout: config.timeout,
            ..Self::new(config.base_url.clone())
        }
    }

    pub fn with_users(mut self, users: u32) -> Self {
        self.users = users;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_wait(mut self, min: Duration, max: Duration) -> Self {
        self.wait_min = min;
        self.wait_max = max;
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<LoadTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_spawn_interval(mut self, interval: Duration) -> Self {
        self.spawn_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.users == 0 {
            return Err(HarnessError::InvalidArgument("at least one user is required".to_string()));
        }
        if self.tasks.iter().map(|t| t.weight as u64).sum::<u64>() == 0 {
            return Err(HarnessError::InvalidArgument(
                "tasks need a positive total weight".to_string(),
            ));
        }
        if self.wait_min > self.wait_max {
            return Err(HarnessError::InvalidArgument(format!(
                "wait range {:?}..{:?} is inverted",
                self.wait_min, self.wait_max
            )));
        }
        Ok(())
    }

    /// Weighted random task; `None` only when every weight is zero
    pub fn pick_task<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&LoadTask> {
        let total: u64 = self.tasks.iter().map(|t| t.weight as u64).sum();
        if total == 0 {
            return None;
        }
        let mut roll = rng.random_range(0..total);
        for task in &self.tasks {
            let weight = task.weight as u64;
            if roll < weight {
                return Some(task);
            }
            roll -= weight;
        }
        None
    }

    pub fn pick_wait<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.wait_max <= self.wait_min {
            return self.wait_min;
        }
        let min = self.wait_min.as_millis() as u64;
        let max = self.wait_max.as_millis() as u64;
        Duration::from_millis(rng.random_range(min..=max))
    }
}
