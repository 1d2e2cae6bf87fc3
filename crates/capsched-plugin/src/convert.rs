use crate::error::PluginError;
use crate::plugin::PluginArgs;
use crate::Result;
use capsched_core::{CapabilityClaim, CoreError, PlacementRequest, Pod, PodKey};

/// Extract the pod's identity
pub fn pod_key(pod: &Pod) -> Result<PodKey> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| PluginError::invalid_pod("pod has no name"))?;
    let namespace = pod
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| PluginError::invalid_pod("pod has no namespace"))?;
    Ok(PodKey::new(namespace, name))
}

/// Derive the pod's capability claim from its spec
///
/// Two declaration forms, merged additively:
/// 1. container resource requests whose key starts with the capability
///    prefix (the class is the key minus the prefix), summed across
///    containers;
/// 2. the claims annotation, a `class=units,class=units` list.
///
/// Capability units are whole counts; a fractional or suffixed quantity is
/// an error rather than a silent zero.
pub fn claim_from_pod(pod: &Pod, args: &PluginArgs) -> Result<CapabilityClaim> {
    let mut claim = CapabilityClaim::new();

    if let Some(spec) = &pod.spec {
        for container in &spec.containers {
            let Some(requests) = container.resources.as_ref().and_then(|r| r.requests.as_ref())
            else {
                continue;
            };

            for (key, quantity) in requests {
                let Some(class) = key.strip_prefix(&args.capability_prefix) else {
                    continue;
                };
                let units: u64 = quantity.0.trim().parse().map_err(|e| {
                    CoreError::invalid_quantity(
                        quantity.0.clone(),
                        format!("request {} is not a whole count: {}", key, e),
                    )
                })?;
                claim.add(class, units);
            }
        }
    }

    if let Some(raw) = pod
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(&args.claims_annotation))
    {
        claim.merge(&CapabilityClaim::parse(raw)?);
    }

    Ok(claim)
}

/// Build the engine's placement request for one (pod, node) call
pub fn placement_request(pod: &Pod, node_name: &str, args: &PluginArgs) -> Result<PlacementRequest> {
    let key = pod_key(pod)?;
    let claim = claim_from_pod(pod, args)?;
    Ok(PlacementRequest::new(key, node_name, claim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_pod(
        name: &str,
        requests: &[(&str, &str)],
        annotations: &[(&str, &str)],
    ) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod.metadata.namespace = Some("default".to_string());

        if !annotations.is_empty() {
            pod.metadata.annotations = Some(
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
        }

        pod.spec = Some(Default::default());
        pod.spec.as_mut().unwrap().containers = vec![Default::default()];
        if !requests.is_empty() {
            let map: BTreeMap<_, _> = requests
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        k8s_openapi::apimachinery::pkg::api::resource::Quantity(v.to_string()),
                    )
                })
                .collect();
            pod.spec.as_mut().unwrap().containers[0].resources = Some(Default::default());
            pod.spec.as_mut().unwrap().containers[0]
                .resources
                .as_mut()
                .unwrap()
                .requests = Some(map);
        }
        pod
    }

    #[test]
    fn test_claim_from_prefixed_requests() {
        let pod = create_test_pod(
            "p1",
            &[
                ("capacity.capsched.io/fast-ssd", "2"),
                ("cpu", "500m"), // Not ours.
            ],
            &[],
        );

        let claim = claim_from_pod(&pod, &PluginArgs::default()).unwrap();
        assert_eq!(claim.get("fast-ssd"), 2);
        assert_eq!(claim.len(), 1);
    }

    #[test]
    fn test_claim_from_annotation() {
        let pod = create_test_pod("p1", &[], &[("capacity.capsched.io/claims", "hdd=1,fast-ssd=2")]);

        let claim = claim_from_pod(&pod, &PluginArgs::default()).unwrap();
        assert_eq!(claim.get("hdd"), 1);
        assert_eq!(claim.get("fast-ssd"), 2);
    }

    #[test]
    fn test_claim_sources_merge() {
        let pod = create_test_pod(
            "p1",
            &[("capacity.capsched.io/fast-ssd", "1")],
            &[("capacity.capsched.io/claims", "fast-ssd=2")],
        );

        let claim = claim_from_pod(&pod, &PluginArgs::default()).unwrap();
        assert_eq!(claim.get("fast-ssd"), 3);
    }

    #[test]
    fn test_fractional_quantity_is_an_error() {
        let pod = create_test_pod("p1", &[("capacity.capsched.io/fast-ssd", "500m")], &[]);
        assert!(claim_from_pod(&pod, &PluginArgs::default()).is_err());
    }

    #[test]
    fn test_malformed_annotation_is_an_error() {
        let pod = create_test_pod("p1", &[], &[("capacity.capsched.io/claims", "fast-ssd")]);
        assert!(claim_from_pod(&pod, &PluginArgs::default()).is_err());
    }

    #[test]
    fn test_pod_without_claims() {
        let pod = create_test_pod("p1", &[], &[]);
        let claim = claim_from_pod(&pod, &PluginArgs::default()).unwrap();
        assert!(claim.is_empty());
    }

    #[test]
    fn test_placement_request() {
        let pod = create_test_pod("p1", &[("capacity.capsched.io/fast-ssd", "1")], &[]);

        let req = placement_request(&pod, "node1", &PluginArgs::default()).unwrap();
        assert_eq!(req.pod, PodKey::new("default", "p1"));
        assert_eq!(req.node, "node1");
        assert_eq!(req.claim.get("fast-ssd"), 1);
    }

    #[test]
    fn test_pod_without_name_is_an_error() {
        let mut pod = create_test_pod("p1", &[], &[]);
        pod.metadata.name = None;
        assert!(placement_request(&pod, "node1", &PluginArgs::default()).is_err());
    }

    #[test]
    fn test_custom_prefix() {
        let args = PluginArgs {
            capability_prefix: "acme.example/".to_string(),
            ..Default::default()
        };
        let pod = create_test_pod("p1", &[("acme.example/gpu-slice", "4")], &[]);

        let claim = claim_from_pod(&pod, &args).unwrap();
        assert_eq!(claim.get("gpu-slice"), 4);
    }
}
