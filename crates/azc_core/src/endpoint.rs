//! Private endpoint kinds and their DNS zones.

use serde::{Deserialize, Serialize};

use crate::environment::AzureCloud;
use crate::error::{CoreError, CoreResult};

/// Target sub-resource of a private endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivateEndpointKind {
    Blob,
    File,
    Queue,
    Table,
    Vault,
    Sql,
    Postgres,
    Mysql,
    Redis,
    ServiceBus,
    Apim,
}

impl PrivateEndpointKind {
    /// Parse a type tag, failing for tags with no known DNS zone.
    pub fn from_tag(tag: &str) -> CoreResult<Self> {
        let kind = match tag.to_lowercase().as_str() {
            "blob" => PrivateEndpointKind::Blob,
            "file" => PrivateEndpointKind::File,
            "queue" => PrivateEndpointKind::Queue,
            "table" => PrivateEndpointKind::Table,
            "vault" | "keyvault" => PrivateEndpointKind::Vault,
            "sql" | "sqlserver" => PrivateEndpointKind::Sql,
            "postgres" | "postgresql" => PrivateEndpointKind::Postgres,
            "mysql" => PrivateEndpointKind::Mysql,
            "redis" => PrivateEndpointKind::Redis,
            "servicebus" => PrivateEndpointKind::ServiceBus,
            "apim" | "gateway" => PrivateEndpointKind::Apim,
            _ => return Err(CoreError::UnsupportedEndpointKind(tag.to_string())),
        };
        Ok(kind)
    }

    /// Sub-resource group id passed to the private link connection.
    pub fn group_id(&self) -> &'static str {
        match self {
            PrivateEndpointKind::Blob => "blob",
            PrivateEndpointKind::File => "file",
            PrivateEndpointKind::Queue => "queue",
            PrivateEndpointKind::Table => "table",
            PrivateEndpointKind::Vault => "vault",
            PrivateEndpointKind::Sql => "sqlServer",
            PrivateEndpointKind::Postgres => "postgresqlServer",
            PrivateEndpointKind::Mysql => "mysqlServer",
            PrivateEndpointKind::Redis => "redisCache",
            PrivateEndpointKind::ServiceBus => "namespace",
            PrivateEndpointKind::Apim => "Gateway",
        }
    }

    /// Private DNS zone for this kind in `cloud`.
    pub fn dns_zone(&self, cloud: AzureCloud) -> &'static str {
        use AzureCloud::{China, Public, UsGovernment};
        use PrivateEndpointKind::*;

        match (*self, cloud) {
            (Blob, Public) => "privatelink.blob.core.windows.net",
            (Blob, China) => "privatelink.blob.core.chinacloudapi.cn",
            (Blob, UsGovernment) => "privatelink.blob.core.usgovcloudapi.net",
            (File, Public) => "privatelink.file.core.windows.net",
            (File, China) => "privatelink.file.core.chinacloudapi.cn",
            (File, UsGovernment) => "privatelink.file.core.usgovcloudapi.net",
            (Queue, Public) => "privatelink.queue.core.windows.net",
            (Queue, China) => "privatelink.queue.core.chinacloudapi.cn",
            (Queue, UsGovernment) => "privatelink.queue.core.usgovcloudapi.net",
            (Table, Public) => "privatelink.table.core.windows.net",
            (Table, China) => "privatelink.table.core.chinacloudapi.cn",
            (Table, UsGovernment) => "privatelink.table.core.usgovcloudapi.net",
            (Vault, Public) => "privatelink.vaultcore.azure.net",
            (Vault, China) => "privatelink.vaultcore.azure.cn",
            (Vault, UsGovernment) => "privatelink.vaultcore.usgovcloudapi.net",
            (Sql, Public) => "privatelink.database.windows.net",
            (Sql, China) => "privatelink.database.chinacloudapi.cn",
            (Sql, UsGovernment) => "privatelink.database.usgovcloudapi.net",
            (Postgres, Public) => "privatelink.postgres.database.azure.com",
            (Postgres, China) => "privatelink.postgres.database.chinacloudapi.cn",
            (Postgres, UsGovernment) => "privatelink.postgres.database.usgovcloudapi.net",
            (Mysql, Public) => "privatelink.mysql.database.azure.com",
            (Mysql, China) => "privatelink.mysql.database.chinacloudapi.cn",
            (Mysql, UsGovernment) => "privatelink.mysql.database.usgovcloudapi.net",
            (Redis, Public) => "privatelink.redis.cache.windows.net",
            (Redis, China) => "privatelink.redis.cache.chinacloudapi.cn",
            (Redis, UsGovernment) => "privatelink.redis.cache.usgovcloudapi.net",
            (ServiceBus, Public) => "privatelink.servicebus.windows.net",
            (ServiceBus, China) => "privatelink.servicebus.chinacloudapi.cn",
            (ServiceBus, UsGovernment) => "privatelink.servicebus.usgovcloudapi.net",
            (Apim, Public) => "privatelink.azure-api.net",
            (Apim, China) => "privatelink.azure-api.cn",
            (Apim, UsGovernment) => "privatelink.azure-api.us",
        }
    }
}
