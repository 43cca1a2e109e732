//! GATT layout resolution.
//!
//! Finds the communication service, its notify/write characteristics and the
//! notification descriptor on an open connection.

use std::collections::HashMap;

use btleplug::api::{Characteristic, Descriptor};
use tracing::debug;
use uuid::Uuid;

use crate::ble::transport::GattConnection;
use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// The two characteristics used to talk to a Bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationCharacteristics {
    /// Characteristic the Bot notifies responses on.
    pub notify: Characteristic,
    /// Characteristic commands are written to.
    pub write: Characteristic,
}

/// Resolves the Bot's GATT layout on a connection.
pub struct ServiceResolver;

impl ServiceResolver {
    /// Discover the communication service and its two characteristics.
    ///
    /// Discovery order is not guaranteed, so the characteristics are matched
    /// by UUID rather than position.
    pub async fn resolve<C>(connection: &C) -> Result<CommunicationCharacteristics>
    where
        C: GattConnection + ?Sized,
    {
        let services = connection
            .discover_services(&[COMMUNICATION_SERVICE_UUID])
            .await
            .map_err(|e| Error::DiscoveryFailed {
                uuid: COMMUNICATION_SERVICE_UUID.to_string(),
                reason: e.to_string(),
            })?;

        let service = services
            .into_iter()
            .find(|s| s.uuid == COMMUNICATION_SERVICE_UUID)
            .ok_or_else(|| Error::ServiceNotFound {
                uuid: COMMUNICATION_SERVICE_UUID.to_string(),
            })?;

        debug!("Found communication service {}", service.uuid);

        let characteristics = connection
            .discover_characteristics(
                &[NOTIFY_CHARACTERISTIC_UUID, WRITE_CHARACTERISTIC_UUID],
                &service,
            )
            .await
            .map_err(|e| Error::DiscoveryFailed {
                uuid: service.uuid.to_string(),
                reason: e.to_string(),
            })?;

        let mut by_uuid: HashMap<Uuid, Characteristic> = characteristics
            .into_iter()
            .filter(|c| is_communication_characteristic(&c.uuid))
            .map(|c| (c.uuid, c))
            .collect();

        debug!("Discovered {} communication characteristics", by_uuid.len());

        let notify = Self::take(&mut by_uuid, NOTIFY_CHARACTERISTIC_UUID)?;
        let write = Self::take(&mut by_uuid, WRITE_CHARACTERISTIC_UUID)?;

        Ok(CommunicationCharacteristics { notify, write })
    }

    /// Discover the CCCD under the notify characteristic.
    pub async fn resolve_notify_descriptor<C>(
        connection: &C,
        notify: &Characteristic,
    ) -> Result<Descriptor>
    where
        C: GattConnection + ?Sized,
    {
        let descriptors = connection
            .discover_descriptors(&[CCCD_UUID], notify)
            .await
            .map_err(|e| Error::DiscoveryFailed {
                uuid: CCCD_UUID.to_string(),
                reason: e.to_string(),
            })?;

        descriptors
            .into_iter()
            .find(|d| d.uuid == CCCD_UUID)
            .ok_or_else(|| Error::DescriptorNotFound {
                uuid: CCCD_UUID.to_string(),
            })
    }

    fn take(by_uuid: &mut HashMap<Uuid, Characteristic>, uuid: Uuid) -> Result<Characteristic> {
        by_uuid
            .remove(&uuid)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::fake::{characteristic, communication_service, descriptor};
    use crate::ble::transport::MockGattConnection;

    fn mock_with_characteristics(characteristics: Vec<Characteristic>) -> MockGattConnection {
        let mut mock = MockGattConnection::new();
        mock.expect_discover_services()
            .returning(|_| Ok(vec![communication_service()]));
        mock.expect_discover_characteristics()
            .returning(move |_, _| Ok(characteristics.clone()));
        mock
    }

    #[tokio::test]
    async fn test_resolve_independent_of_order() {
        let notify = characteristic(NOTIFY_CHARACTERISTIC_UUID);
        let write = characteristic(WRITE_CHARACTERISTIC_UUID);

        for order in [
            vec![notify.clone(), write.clone()],
            vec![write.clone(), notify.clone()],
        ] {
            let mock = mock_with_characteristics(order);
            let resolved = ServiceResolver::resolve(&mock).await.unwrap();
            assert_eq!(resolved.notify.uuid, NOTIFY_CHARACTERISTIC_UUID);
            assert_eq!(resolved.write.uuid, WRITE_CHARACTERISTIC_UUID);
        }
    }

    #[tokio::test]
    async fn test_service_not_found() {
        let mut mock = MockGattConnection::new();
        mock.expect_discover_services().returning(|_| Ok(vec![]));
        mock.expect_discover_characteristics().never();

        let result = ServiceResolver::resolve(&mock).await;
        assert!(matches!(result, Err(Error::ServiceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_characteristic_not_found() {
        let mock = mock_with_characteristics(vec![characteristic(NOTIFY_CHARACTERISTIC_UUID)]);

        match ServiceResolver::resolve(&mock).await {
            Err(Error::CharacteristicNotFound { uuid }) => {
                assert_eq!(uuid, WRITE_CHARACTERISTIC_UUID.to_string())
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_discovery_failure_is_reported() {
        let mut mock = MockGattConnection::new();
        mock.expect_discover_services()
            .returning(|_| Err(Error::Internal("radio busy".to_string())));

        let result = ServiceResolver::resolve(&mock).await;
        assert!(matches!(result, Err(Error::DiscoveryFailed { .. })));
    }

    #[tokio::test]
    async fn test_resolve_notify_descriptor() {
        let notify = characteristic(NOTIFY_CHARACTERISTIC_UUID);

        let mut mock = MockGattConnection::new();
        mock.expect_discover_descriptors()
            .returning(|_, c| Ok(vec![descriptor(c.uuid, CCCD_UUID)]));
        let found = ServiceResolver::resolve_notify_descriptor(&mock, &notify)
            .await
            .unwrap();
        assert_eq!(found.uuid, CCCD_UUID);
        assert_eq!(found.characteristic_uuid, NOTIFY_CHARACTERISTIC_UUID);

        let mut mock = MockGattConnection::new();
        mock.expect_discover_descriptors().returning(|_, _| Ok(vec![]));
        let missing = ServiceResolver::resolve_notify_descriptor(&mock, &notify).await;
        assert!(matches!(missing, Err(Error::DescriptorNotFound { .. })));
    }
}
