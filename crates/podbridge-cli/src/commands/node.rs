use podbridge_provider::Provider;

pub fn run(provider: &Provider, json: bool) -> anyhow::Result<()> {
    let node = provider.node_info();
    let capacity = provider.capacity();
    let addresses = provider.node_addresses();
    let config = provider.config();

    if json {
        let addresses: Vec<serde_json::Value> = addresses
            .iter()
            .map(|a| serde_json::json!({ "type": a.kind, "address": a.address }))
            .collect();
        let output = serde_json::json!({
            "name": node.name,
            "operatingSystem": provider.operating_system(),
            "addresses": addresses,
            "daemonEndpointPort": provider.daemon_endpoint_port(),
            "capacity": capacity,
            "cluster": config.cluster,
            "region": config.region,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Node:     {}", node.name);
    println!("OS:       {}", provider.operating_system());
    for address in &addresses {
        println!("Address:  {} ({})", address.address, address.kind);
    }
    println!("Port:     {}", provider.daemon_endpoint_port());
    println!("Capacity: cpu={} memory={} pods={}", capacity.cpu, capacity.memory, capacity.pods);
    println!("Cluster:  {} ({})", config.cluster, config.region);
    Ok(())
}
