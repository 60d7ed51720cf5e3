//! Loading related resources from the repository.

use crate::db::ResourceRepository;
use crate::error::{PanelError, Result};
use crate::models::{Relation, RelationshipSpec};

use super::Resource;

/// Related records for one relationship.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Resource>),
    Many(Vec<Resource>),
}

impl Related {
    pub fn len(&self) -> usize {
        match self {
            Self::One(target) => usize::from(target.is_some()),
            Self::Many(targets) => targets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Follows relationship edges through a repository.
///
/// Callers decide permission beforehand; the loader queries whatever it
/// is asked for.
#[derive(Clone, Copy)]
pub struct RelationshipLoader<'a> {
    repository: &'a dyn ResourceRepository,
}

impl<'a> RelationshipLoader<'a> {
    pub fn new(repository: &'a dyn ResourceRepository) -> Self {
        Self { repository }
    }

    pub async fn load(&self, parent: &Resource, spec: &RelationshipSpec) -> Result<Related> {
        let repo = self.repository;

        let related = match (spec.relation, parent) {
            (Relation::LocationNodes, Resource::Location(location)) => Related::Many(
                repo.nodes_for_location(location.id)
                    .await?
                    .into_iter()
                    .map(Resource::from)
                    .collect(),
            ),
            (Relation::LocationServers, Resource::Location(location)) => Related::Many(
                repo.servers_for_location(location.id)
                    .await?
                    .into_iter()
                    .map(Resource::from)
                    .collect(),
            ),
            (Relation::NodeLocation, Resource::Node(node)) => {
                Related::One(repo.find_location(node.location_id).await?.map(Resource::from))
            }
            (Relation::NodeServers, Resource::Node(node)) => Related::Many(
                repo.servers_for_node(node.id)
                    .await?
                    .into_iter()
                    .map(Resource::from)
                    .collect(),
            ),
            (Relation::ServerLocation, Resource::Server(server)) => {
                Related::One(repo.location_for_server(server.id).await?.map(Resource::from))
            }
            (Relation::ServerNode, Resource::Server(server)) => {
                Related::One(repo.find_node(server.node_id).await?.map(Resource::from))
            }
            (relation, parent) => {
                return Err(PanelError::internal(format!(
                    "relationship {:?} is not declared on {}",
                    relation,
                    parent.kind()
                )));
            }
        };

        Ok(related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use crate::models::{Location, Node, ResourceKind, Server};

    fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert_location(Location::new(1, "us.nyc", None));
        repo.insert_location(Location::new(2, "eu.ams", None));
        repo.insert_node(Node::new(10, 1, "nyc-1", "nyc-1.example.com"));
        repo.insert_node(Node::new(11, 1, "nyc-2", "nyc-2.example.com"));
        repo.insert_server(Server::new(100, 10, "lobby"));
        repo.insert_server(Server::new(101, 11, "survival"));
        repo
    }

    #[tokio::test]
    async fn test_location_nodes_and_servers() {
        let repo = seeded();
        let loader = RelationshipLoader::new(&repo);
        let location = Resource::from(repo.find_location(1).await.unwrap().unwrap());

        let nodes = loader
            .load(&location, ResourceKind::Location.relationship("nodes").unwrap())
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);

        let servers = loader
            .load(&location, ResourceKind::Location.relationship("servers").unwrap())
            .await
            .unwrap();
        assert_eq!(servers.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_location() {
        let repo = seeded();
        let loader = RelationshipLoader::new(&repo);
        let location = Resource::from(repo.find_location(2).await.unwrap().unwrap());

        let nodes = loader
            .load(&location, ResourceKind::Location.relationship("nodes").unwrap())
            .await
            .unwrap();
        assert_eq!(nodes, Related::Many(Vec::new()));
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn test_server_location_through_node() {
        let repo = seeded();
        let loader = RelationshipLoader::new(&repo);
        let server = Resource::from(repo.find_server(101).await.unwrap().unwrap());

        let location = loader
            .load(&server, ResourceKind::Server.relationship("location").unwrap())
            .await
            .unwrap();

        match location {
            Related::One(Some(Resource::Location(location))) => assert_eq!(location.id, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mismatched_parent_is_internal_error() {
        let repo = seeded();
        let loader = RelationshipLoader::new(&repo);
        let server = Resource::from(repo.find_server(100).await.unwrap().unwrap());

        let error = loader
            .load(&server, ResourceKind::Location.relationship("nodes").unwrap())
            .await
            .unwrap_err();
        assert_eq!(error.code(), crate::error::ErrorCode::InternalError);
    }
}
