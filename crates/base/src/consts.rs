pub mod k8s {
    pub mod labels {
        /// Label set by Cartographer on every pod template it stamps out for a
        /// workload.
        pub const WORKLOAD_NAME: &str = "carto.run/workload-name";
    }

    pub mod annotations {
        //! Annotation suffixes read by the default catalog. The full key is
        //! `<prefix>/<suffix>`.

        pub const READINESS_PROBE: &str = "readinessProbe";
        pub const LIVENESS_PROBE: &str = "livenessProbe";
        pub const STARTUP_PROBE: &str = "startupProbe";
        pub const ARGS: &str = "args";
        pub const STORAGE: &str = "storage";
        pub const TOLERATIONS: &str = "tolerations";
        pub const NODE_SELECTOR: &str = "nodeSelector";
        pub const AFFINITY: &str = "affinity";
    }

    pub mod env {
        /// Environment variable injected into every container of a workload.
        pub const WORKLOAD_NAME: &str = "CARTO_RUN_WORKLOAD_NAME";
    }
}

pub mod oci {
    pub mod labels {
        /// Human-readable title of the image.
        pub const TITLE: &str = "org.opencontainers.image.title";
    }
}

pub mod webhook {
    pub const API_VERSION: &str = "webhooks.conventions.carto.run/v1alpha1";
    pub const KIND: &str = "PodConventionContext";
}

/// Port the convention server listens on when neither the configuration nor
/// `PORT` says otherwise.
pub const DEFAULT_LISTEN_PORT: u16 = 9000;
