//! GraphQL documents used by the session layer.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Serve from the local cache when present, otherwise fetch
    CacheFirst,
    /// Always fetch; the result is still written to the cache
    NetworkOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
    pub kind: OperationKind,
    pub fetch_policy: FetchPolicy,
}

impl Operation {
    /// Cache identity: operation name plus canonical (key-sorted) variables.
    pub fn cache_key(&self, variables: &Value) -> String {
        let mut key = format!("{}(", self.name);
        write_canonical(variables, &mut key);
        key.push(')');
        key
    }

    pub fn reads_cache(&self) -> bool {
        self.kind == OperationKind::Query && self.fetch_policy == FetchPolicy::CacheFirst
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

pub const ME: Operation = Operation {
    name: "Me",
    document: r#"query Me {
  me {
    __typename
    id
    name
    email
    username
    phoneNumber
    avatarUrl
    avatarThumbnailUrl
    createdAt
    updatedAt
  }
}"#,
    kind: OperationKind::Query,
    fetch_policy: FetchPolicy::NetworkOnly,
};

pub const UPDATE_USER: Operation = Operation {
    name: "UpdateUser",
    document: r#"mutation UpdateUser($id: ID!, $user: UserInput!) {
  updateUser(id: $id, user: $user) {
    __typename
    id
    name
    email
    username
    phoneNumber
    avatarUrl
    avatarThumbnailUrl
    createdAt
    updatedAt
  }
}"#,
    kind: OperationKind::Mutation,
    fetch_policy: FetchPolicy::NetworkOnly,
};

pub const CREATE_ATTACHMENT: Operation = Operation {
    name: "CreateAttachment",
    document: r#"mutation CreateAttachment($signedId: String!, $relatedId: ID!, $relatedType: String!, $attribute: String!) {
  createAttachment(signedId: $signedId, relatedId: $relatedId, relatedType: $relatedType, attribute: $attribute) {
    __typename
    id
    url
    thumbnailUrl
    createdAt
    updatedAt
    blob {
      __typename
      id
      key
      filename
      contentType
      byteSize
      checksum
      createdAt
    }
  }
}"#,
    kind: OperationKind::Mutation,
    fetch_policy: FetchPolicy::NetworkOnly,
};
