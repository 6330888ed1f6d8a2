//! Status aggregation.
//!
//! Pure reduction from raw per-instance observations to derived status and
//! metrics at every level of the tree. Every reduction here is commutative
//! over children: reordering instances, services or applications never
//! changes a derived value.

use super::model::{
    AnnotatedTree, Application, ApplicationHealth, RootSnapshot, Service, ServiceHealth, Status,
};

/// Annotate a raw tree with derived status and metrics.
pub fn aggregate(tree: RootSnapshot) -> AnnotatedTree {
    let applications: Vec<ApplicationHealth> =
        tree.applications.into_iter().map(application_health).collect();

    let status = Status::worst(applications.iter().map(|a| a.status));
    let applications_up = applications.iter().filter(|a| a.status == Status::Up).count();
    let services_up = applications.iter().map(|a| a.services_up).sum();
    let services_total = applications.iter().map(|a| a.services_total).sum();
    let instances_up = applications.iter().map(|a| a.instances_up).sum();
    let instances_total = applications.iter().map(|a| a.instances_total).sum();

    AnnotatedTree {
        status,
        applications_up,
        applications_total: applications.len(),
        services_up,
        services_total,
        instances_up,
        instances_total,
        applications,
    }
}

/// Derive an application's status (worst of its services) and totals.
pub fn application_health(app: Application) -> ApplicationHealth {
    let services: Vec<ServiceHealth> = app.services.into_iter().map(service_health).collect();

    ApplicationHealth {
        name: app.name,
        status: Status::worst(services.iter().map(|s| s.status)),
        services_up: services.iter().filter(|s| s.status == Status::Up).count(),
        services_total: services.len(),
        instances_up: services.iter().map(|s| s.instances_up).sum(),
        instances_total: services.iter().map(|s| s.instances_total).sum(),
        services,
    }
}

/// Derive a service's status, up/total counters and average response time.
///
/// With no instances the service is `Up` with no response metric.
pub fn service_health(service: Service) -> ServiceHealth {
    let instances_total = service.instances.len();
    let instances_up = service.instances.iter().filter(|i| i.up).count();
    let status = service_status(instances_up, instances_total, service.max_failures);

    let average_response_time = if instances_up == 0 {
        None
    } else {
        let sum: f64 = service
            .instances
            .iter()
            .filter(|i| i.up)
            .map(|i| i.response_time)
            .sum();
        Some(sum / instances_up as f64)
    };

    ServiceHealth {
        name: service.name,
        status,
        instances_up,
        instances_total,
        average_response_time,
        instances: service.instances,
    }
}

fn service_status(up: usize, total: usize, max_failures: Option<u32>) -> Status {
    let down = total - up;
    if down == 0 {
        return Status::Up;
    }
    let failed = match max_failures {
        Some(budget) => down > budget as usize,
        None => up == 0,
    };
    if failed {
        Status::Failed
    } else {
        Status::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Instance;

    fn inst(id: &str, up: bool, response_time: f64) -> Instance {
        Instance {
            id: id.to_string(),
            up,
            response_time,
            last_change: None,
        }
    }

    fn service(name: &str, instances: Vec<Instance>) -> Service {
        Service {
            name: name.to_string(),
            instances,
            max_failures: None,
        }
    }

    #[test]
    fn test_service_up_up_down_is_degraded() {
        let health = service_health(service(
            "web",
            vec![inst("a", true, 1.0), inst("b", true, 1.0), inst("c", false, 1.0)],
        ));
        assert_eq!(health.status, Status::Degraded);
        assert_eq!(health.instances_up, 2);
        assert_eq!(health.instances_total, 3);
    }

    #[test]
    fn test_service_all_down_is_failed() {
        let health = service_health(service(
            "web",
            vec![inst("a", false, 1.0), inst("b", false, 1.0)],
        ));
        assert_eq!(health.status, Status::Failed);
        assert_eq!(health.average_response_time, None);
    }

    #[test]
    fn test_service_all_up_is_up() {
        let health =
            service_health(service("web", vec![inst("a", true, 1.0), inst("b", true, 3.0)]));
        assert_eq!(health.status, Status::Up);
        assert_eq!(health.average_response_time, Some(2.0));
    }

    #[test]
    fn test_service_without_instances() {
        let health = service_health(service("web", vec![]));
        assert_eq!(health.status, Status::Up);
        assert_eq!(health.instances_total, 0);
        assert_eq!(health.average_response_time, None);
    }

    #[test]
    fn test_average_ignores_down_instances() {
        let health = service_health(service(
            "web",
            vec![inst("a", true, 100.0), inst("b", true, 300.0), inst("c", false, 9999.0)],
        ));
        assert_eq!(health.average_response_time, Some(200.0));
    }

    #[test]
    fn test_failure_budget() {
        let mut svc = service(
            "web",
            vec![inst("a", true, 1.0), inst("b", false, 1.0), inst("c", false, 1.0)],
        );
        svc.max_failures = Some(1);
        assert_eq!(service_health(svc.clone()).status, Status::Failed);

        svc.max_failures = Some(2);
        assert_eq!(service_health(svc.clone()).status, Status::Degraded);

        // A budget can also keep an all-down service merely degraded.
        svc.instances[0].up = false;
        svc.max_failures = Some(5);
        assert_eq!(service_health(svc).status, Status::Degraded);
    }

    #[test]
    fn test_application_is_worst_of_services() {
        let app = Application {
            name: "shop".to_string(),
            services: vec![
                service("web", vec![inst("a", true, 1.0)]),
                service("db", vec![inst("b", true, 1.0), inst("c", false, 1.0)]),
                service("cache", vec![]),
            ],
        };
        let health = application_health(app);
        assert_eq!(health.status, Status::Degraded);
        assert_eq!(health.services_up, 2);
        assert_eq!(health.services_total, 3);
        assert_eq!(health.instances_up, 2);
        assert_eq!(health.instances_total, 3);
    }

    #[test]
    fn test_root_totals() {
        let tree = RootSnapshot {
            applications: vec![
                Application {
                    name: "shop".to_string(),
                    services: vec![service("web", vec![inst("a", false, 1.0)])],
                },
                Application {
                    name: "blog".to_string(),
                    services: vec![service("web", vec![inst("a", true, 1.0)])],
                },
            ],
        };
        let annotated = aggregate(tree);
        assert_eq!(annotated.status, Status::Failed);
        assert_eq!(annotated.applications_up, 1);
        assert_eq!(annotated.applications_total, 2);
        assert_eq!(annotated.services_up, 1);
        assert_eq!(annotated.services_total, 2);
        assert_eq!(annotated.instances_up, 1);
        assert_eq!(annotated.instances_total, 2);
    }

    #[test]
    fn test_empty_tree_is_up() {
        let annotated = aggregate(RootSnapshot::default());
        assert_eq!(annotated.status, Status::Up);
        assert_eq!(annotated.applications_total, 0);
    }

    #[test]
    fn test_order_independence() {
        let instances = vec![
            inst("a", true, 100.0),
            inst("b", false, 50.0),
            inst("c", true, 300.0),
            inst("d", true, 200.0),
        ];
        let baseline = service_health(service("web", instances.clone()));

        // Every rotation and the reversal yield the same derived values.
        for shift in 0..instances.len() {
            let mut permuted = instances.clone();
            permuted.rotate_left(shift);
            let health = service_health(service("web", permuted.clone()));
            assert_eq!(health.status, baseline.status);
            assert_eq!(health.instances_up, baseline.instances_up);
            assert_eq!(health.average_response_time, baseline.average_response_time);

            permuted.reverse();
            let health = service_health(service("web", permuted));
            assert_eq!(health.status, baseline.status);
            assert_eq!(health.average_response_time, baseline.average_response_time);
        }

        let services = vec![
            service("web", vec![inst("a", true, 1.0)]),
            service("db", vec![inst("b", false, 1.0)]),
        ];
        let forward = application_health(Application {
            name: "shop".to_string(),
            services: services.clone(),
        });
        let backward = application_health(Application {
            name: "shop".to_string(),
            services: services.into_iter().rev().collect(),
        });
        assert_eq!(forward.status, backward.status);
        assert_eq!(forward.services_up, backward.services_up);
    }
}
