//! Built-in node kinds.
//!
//! Each kind is described by a [`KindProfile`]: which lab sub-directories it
//! needs, how they are mounted, which env defaults and launch flags apply, and
//! which files get staged. Every host path a profile can name is a fixed
//! suffix under the node's lab directory; the only exception is the host
//! device bind, which exposes `/dev` itself.

use std::path::{Path, PathBuf};

use crate::models::{LaunchSpec, MgmtNet};

pub const CRPD: &str = "crpd";
pub const SONIC: &str = "sonic";
pub const VR_SROS: &str = "vr-sros";

/// Connection mode used by vrnetlab images when the node sets none.
pub const VR_DEFAULT_CONNECTION_MODE: &str = "tc";
pub const VR_SROS_DEFAULT_TYPE: &str = "sr-1";
pub const CONNECTION_MODE_ENV: &str = "CONNECTION_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindRule {
    pub lab_suffix: &'static str,
    pub container_path: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvValue {
    Literal(&'static str),
    MgmtIpv4Subnet,
    MgmtIpv6Subnet,
}

impl EnvValue {
    pub fn resolve(&self, mgmt: &MgmtNet) -> String {
        match self {
            EnvValue::Literal(v) => v.to_string(),
            EnvValue::MgmtIpv4Subnet => mgmt.ipv4_subnet.clone(),
            EnvValue::MgmtIpv6Subnet => mgmt.ipv6_subnet.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvDefault {
    pub key: &'static str,
    pub value: EnvValue,
}

/// Extra host bind added only when `env_key` equals `trigger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBind {
    pub env_key: &'static str,
    pub trigger: &'static str,
    pub host_path: &'static str,
    pub container_path: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdStyle {
    /// Leave the image's own command alone.
    ImageDefault,
    /// vrnetlab `launch.py` arguments.
    Vrnetlab,
}

impl CmdStyle {
    pub fn build(&self, spec: &LaunchSpec) -> String {
        match self {
            CmdStyle::ImageDefault => String::new(),
            CmdStyle::Vrnetlab => format!(
                "--trace --connection-mode {} --hostname {} --variant \"{}\"",
                spec.env
                    .get(CONNECTION_MODE_ENV)
                    .map(String::as_str)
                    .unwrap_or_default(),
                spec.short_name,
                spec.node_type,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderGate {
    Always,
    /// Only rendered when the node carries a license.
    RequiresLicense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigTarget {
    pub lab_suffix: &'static str,
    pub gate: RenderGate,
}

/// A file shipped in the templates directory that the image cannot boot without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportFile {
    pub template: &'static str,
    pub lab_suffix: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProfile {
    pub kind: &'static str,
    /// Default config template, relative to the templates directory.
    pub default_template: Option<&'static str>,
    pub default_node_type: Option<&'static str>,
    pub directories: &'static [&'static str],
    pub binds: &'static [BindRule],
    pub env_defaults: &'static [EnvDefault],
    pub device_bind: Option<DeviceBind>,
    pub entrypoint: Option<&'static str>,
    pub cmd: CmdStyle,
    pub config_target: Option<ConfigTarget>,
    pub support_files: &'static [SupportFile],
    pub license_target: Option<&'static str>,
}

pub static CRPD_PROFILE: KindProfile = KindProfile {
    kind: CRPD,
    default_template: Some("crpd/juniper.conf"),
    default_node_type: None,
    directories: &["config", "log"],
    binds: &[
        BindRule {
            lab_suffix: "config",
            container_path: "/config",
        },
        BindRule {
            lab_suffix: "log",
            container_path: "/var/log",
        },
        BindRule {
            lab_suffix: "config/sshd_config",
            container_path: "/etc/ssh/sshd_config",
        },
    ],
    env_defaults: &[],
    device_bind: None,
    entrypoint: None,
    cmd: CmdStyle::ImageDefault,
    config_target: Some(ConfigTarget {
        lab_suffix: "config/juniper.conf",
        gate: RenderGate::Always,
    }),
    support_files: &[SupportFile {
        template: "crpd/sshd_config",
        lab_suffix: "config/sshd_config",
    }],
    license_target: Some("config/license.conf"),
};

// supervisord must not start before the veth interfaces are attached
pub static SONIC_PROFILE: KindProfile = KindProfile {
    kind: SONIC,
    default_template: None,
    default_node_type: None,
    directories: &[],
    binds: &[],
    env_defaults: &[],
    device_bind: None,
    entrypoint: Some("/bin/bash"),
    cmd: CmdStyle::ImageDefault,
    config_target: None,
    support_files: &[],
    license_target: None,
};

pub static VR_SROS_PROFILE: KindProfile = KindProfile {
    kind: VR_SROS,
    default_template: Some("vr-sros/config.txt"),
    default_node_type: Some(VR_SROS_DEFAULT_TYPE),
    directories: &["tftpboot"],
    binds: &[BindRule {
        lab_suffix: "tftpboot",
        container_path: "/tftpboot",
    }],
    env_defaults: &[
        EnvDefault {
            key: CONNECTION_MODE_ENV,
            value: EnvValue::Literal(VR_DEFAULT_CONNECTION_MODE),
        },
        EnvDefault {
            key: "DOCKER_NET_V4_ADDR",
            value: EnvValue::MgmtIpv4Subnet,
        },
        EnvDefault {
            key: "DOCKER_NET_V6_ADDR",
            value: EnvValue::MgmtIpv6Subnet,
        },
    ],
    device_bind: Some(DeviceBind {
        env_key: CONNECTION_MODE_ENV,
        trigger: "macvtap",
        host_path: "/dev",
        container_path: "/dev",
    }),
    entrypoint: None,
    cmd: CmdStyle::Vrnetlab,
    config_target: Some(ConfigTarget {
        lab_suffix: "tftpboot/config.txt",
        gate: RenderGate::RequiresLicense,
    }),
    support_files: &[],
    license_target: Some("tftpboot/license.txt"),
};

pub fn builtin_profiles() -> [&'static KindProfile; 3] {
    [&CRPD_PROFILE, &SONIC_PROFILE, &VR_SROS_PROFILE]
}

/// Join a fixed profile suffix onto a lab directory.
pub fn under_lab(lab_dir: &Path, suffix: &'static str) -> PathBuf {
    lab_dir.join(suffix)
}
