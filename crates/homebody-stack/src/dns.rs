use homebody_aws::{
    ARecord, ARecordProps, HostedZone, HostedZoneProviderProps, Instance, RecordTarget,
};
use homebody_cloud::Stack;

pub const ZONE_ID: &str = "Zone";
pub const DOMAIN_NAME: &str = "ask-frank.shop";
pub const RECORD_ID: &str = "ServerRecord";

/// Point the zone apex at the instance's public address
pub fn bind_dns(stack: &mut Stack, instance: &Instance) -> (HostedZone, ARecord) {
    let zone = HostedZone::from_lookup(stack, ZONE_ID, HostedZoneProviderProps::new(DOMAIN_NAME));
    let record = ARecord::new(
        stack,
        RECORD_ID,
        ARecordProps::new(
            &zone,
            RecordTarget::from_ip_addresses([instance.instance_public_ip()]),
        ),
    );
    (zone, record)
}
