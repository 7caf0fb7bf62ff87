use k8s_openapi::api::core::v1::{Container, EnvVar};

pub trait ContainerExt {
    /// Adds `env_var` unless a variable with the same name is already
    /// defined. Returns whether the variable was added.
    fn add_env_var(&mut self, env_var: EnvVar) -> bool;
}

impl ContainerExt for Container {
    fn add_env_var(&mut self, env_var: EnvVar) -> bool {
        let env = self.env.get_or_insert_with(Vec::new);
        if env.iter().any(|existing| existing.name == env_var.name) {
            return false;
        }
        env.push(env_var);
        true
    }
}
